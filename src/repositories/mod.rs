pub mod booking_repository;
pub mod listing_repository;
pub mod memory;
pub mod store;
pub mod user_repository;

// Re-export all repositories for convenient access
pub use booking_repository::BookingRepository;
pub use listing_repository::ListingRepository;
pub use memory::{InMemoryBookingStore, InMemoryListingStore, InMemoryUserStore};
pub use store::{BookingStore, ListingStore, UserStore};
pub use user_repository::UserRepository;

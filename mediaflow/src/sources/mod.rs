//! External source integrations built on the core primitives.

pub mod anidb;
pub mod anilist;

pub use anidb::{AnidbWishlist, WishlistConfig, WishlistEntry};
pub use anilist::{AiringNode, AniListClient};

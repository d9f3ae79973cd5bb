pub mod assets;
pub mod challenge;
pub mod errors;
pub mod events;
pub mod finalization;
pub mod fork;
pub mod handlers;
pub mod helpers;
pub mod requests;
pub mod store;

pub use assets::*;
pub use challenge::*;
pub use errors::*;
pub use events::*;
pub use handlers::*;
pub use requests::*;
pub use store::*;

pub mod account;
pub mod item;

pub use account::{Account, AccountId, NewAccount};
pub use item::{Item, ItemChanges, ItemId, NewItem};

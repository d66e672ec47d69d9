mod store;

pub use store::StoreCommands;

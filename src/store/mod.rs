pub mod candle_store;
pub mod cooldown_store;

pub use candle_store::{CandleStore, SeriesSlot};
pub use cooldown_store::{CooldownStore, FileCooldownStore, InMemoryCooldownStore};

pub mod candle;
pub mod levels;
pub mod setup;
pub mod signal;
pub mod timeframe;
pub mod types;
pub mod zone;

pub use candle::{Candle, CandleSeries};
pub use levels::Levels;
pub use setup::{Setup, SetupMeta};
pub use signal::Signal;
pub use timeframe::Timeframe;
pub use types::*;
pub use zone::{Zone, ZoneKind};

pub mod baseline;
pub mod remote;
pub mod weekday;

pub use baseline::BaselineMean;
pub use remote::RemotePredictor;
pub use weekday::WeekdayMean;

pub mod atc;
pub mod ble;
pub mod power;
pub mod rtc;

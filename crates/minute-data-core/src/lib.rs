pub mod candle;
pub mod error;
pub mod normalize;
pub mod request;
pub mod result;
pub mod window;

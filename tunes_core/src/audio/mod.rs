pub mod decoder;
pub mod mel;

pub use decoder::{decode_mono, DecodedAudio};
pub use mel::mel_spectrogram_db;

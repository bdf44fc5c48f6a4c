pub mod check;
pub mod preset;
pub mod replay;
pub mod timecode;

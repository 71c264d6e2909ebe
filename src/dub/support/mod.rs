pub mod ffmpeg;
pub mod tools;

pub mod chacha;

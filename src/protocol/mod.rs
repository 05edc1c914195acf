pub mod framing;
pub mod intake;
pub mod record;

#[cfg(test)]
mod tests;

pub use self::framing::*;
pub use self::intake::*;
pub use self::record::*;

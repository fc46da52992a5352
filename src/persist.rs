//! Helpers for the plain-text, whitespace-separated save-state format.

use std::{error::Error, fmt::Display, io::Read, str::FromStr};

/// Pull-parser over the whitespace-separated fields of a save state.
///
/// Every loader in the crate reads through one of these so a truncated or
/// malformed file fails with the same error shape no matter which section
/// it died in.
pub struct Tokens {
    words: Vec<String>,
    cursor: usize,
}

impl Tokens {
    pub fn from_reader(mut r: impl Read) -> Result<Self, Box<dyn Error>> {
        let mut buf = String::new();
        r.read_to_string(&mut buf)?;
        Ok(Self {
            words: buf.split_whitespace().map(str::to_owned).collect(),
            cursor: 0,
        })
    }

    /// Parse the next field as `T`. Running out of fields or failing to
    /// parse is an error; the format never pads or truncates silently.
    pub fn next<T: FromStr>(&mut self) -> Result<T, Box<dyn Error>>
    where
        T::Err: Display,
    {
        let word = self
            .words
            .get(self.cursor)
            .ok_or("save state ended before all fields were read")?;
        self.cursor += 1;
        word.parse()
            .map_err(|e| format!("bad save state field {word:?}: {e}").into())
    }
}

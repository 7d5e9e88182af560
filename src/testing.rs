//! Testing utilities for code built on the tokenizer.
//!
//! - **Assertions**: compare decoded rows, and check that a set of byte-range
//!   splits partitions a text exactly ([`assert_split_partition`])
//! - **Mock I/O**: temporary files holding text, removed on drop
//!
//! # Quick Start
//!
//! ```
//! use textsplit::TextFormat;
//! use textsplit::testing::*;
//!
//! # fn main() -> anyhow::Result<()> {
//! let format = TextFormat::builder().field_separator(',').build()?;
//! let file = mock_text_file("a,b\nc,d\n")?;
//!
//! let actual = textsplit::io::text::read_text_vec(&format, file.path())?;
//! assert_rows_equal(&actual, &rows(&[&["a", "b"], &["c", "d"]]));
//!
//! assert_split_partition(b"a,b\nc,d\n", &[3]);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod mock_io;

pub use assertions::*;
pub use mock_io::*;

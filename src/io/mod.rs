pub mod text;

#[cfg_attr(docsrs, doc(cfg(feature = "glob")))]
#[cfg(feature = "glob")]
pub mod glob;

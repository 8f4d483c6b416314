pub mod sdg;
pub mod summary;

#[cfg(test)]
pub(crate) mod testing;

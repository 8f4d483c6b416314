pub mod slicer;

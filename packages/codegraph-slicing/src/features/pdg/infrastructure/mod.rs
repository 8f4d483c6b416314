pub mod pdg;

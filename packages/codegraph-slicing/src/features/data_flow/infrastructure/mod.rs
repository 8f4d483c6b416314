pub mod reaching_definitions;

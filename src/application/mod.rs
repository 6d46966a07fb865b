// Application layer - use cases exposed to the UI and the scanner glue
pub mod services;

pub mod coin;
pub mod market;
pub mod settings;
pub mod update;
pub mod view;
pub mod wire;

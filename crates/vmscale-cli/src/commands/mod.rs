pub mod lookup;
pub mod run;

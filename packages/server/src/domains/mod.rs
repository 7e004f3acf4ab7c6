pub mod supporters;

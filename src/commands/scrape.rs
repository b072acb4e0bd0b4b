mod aggregate;
mod fetch;
mod normalize;
mod play_store;
mod run;
#[cfg(test)]
mod tests;

pub use run::run;

mod fetch;

pub use fetch::NativeFetcher;

pub mod domain;
pub mod shared;
pub mod usecases;

#[cfg(test)]
pub mod test_support;

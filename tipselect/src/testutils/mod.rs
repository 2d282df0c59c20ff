pub mod tangle_mock;

pub mod frames;
pub mod mock_broker;
pub mod mock_ws;

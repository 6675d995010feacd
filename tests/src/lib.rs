mod mock;
mod mock_bts;
mod mock_msc;

pub use mock::IpaConnection;
pub use mock_bsc::MockBsc;
pub use mock_bts::{MockBts, identify, send_identity};
pub use mock_msc::{MockMsc, recv_sccp, send_sccp};

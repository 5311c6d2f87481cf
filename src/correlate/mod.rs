pub use correlate::{Correlator, Registration, Role, Summary};
pub use pending::{Key, Pending, Table};

mod correlate;
mod pending;

pub mod remote;

pub use remote::{PipoqueiroListService, RemoteListService};

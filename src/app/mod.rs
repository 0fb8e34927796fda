// Application layer - Use case interactors

pub mod container;
pub mod merge_interactor;
pub mod scan_interactor;

// Re-export interactors
pub use container::{AppContainer, DefaultAppContainer};
pub use merge_interactor::{MergeInteractor, MergeRequest};
pub use scan_interactor::{ScanInteractor, ScanResult};

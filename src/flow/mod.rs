pub mod router;

pub use router::FlowRouter;

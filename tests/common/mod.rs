pub(crate) mod fixture;

pub(crate) mod logging;

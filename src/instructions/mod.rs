// (C) Copyright 2019 Hewlett Packard Enterprise Development LP

mod exec_form;
pub use exec_form::*;

mod flags;
pub use flags::CopyFlags;

mod from;
pub use from::*;

mod arg;
pub use arg::*;

mod env;
pub use env::*;

mod label;
pub use label::*;

mod maintainer;
pub use maintainer::*;

mod copy;
pub use copy::*;

mod add;
pub use add::*;

mod package;
pub use package::*;

mod run;
pub use run::*;

mod cmd;
pub use cmd::*;

mod entrypoint;
pub use entrypoint::*;

mod healthcheck;
pub use healthcheck::*;

mod expose;
pub use expose::*;

mod user;
pub use user::*;

mod volume;
pub use volume::*;

mod workdir;
pub use workdir::*;

mod shell;
pub use shell::*;

mod onbuild;
pub use onbuild::*;

mod stopsignal;
pub use stopsignal::*;

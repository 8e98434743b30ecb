use super::parsers::{parse_bool_env, parse_duration_arg, parse_header};
use super::*;
use clap::Parser;
use std::time::Duration;


fn parse_test_args<I, T>(args: I) -> Result<RunArgs, String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    RunArgs::try_parse_from(args).map_err(|err| format!("parse failed: {}", err))
}

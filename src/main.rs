use anyhow::Result;
use clap::Parser;

use crate::config::cmd::CmdArgs;
use crate::subcmd::merge::MergeCommand;
use crate::subcmd::print_failed;
use crate::subcmd::show_info::ShowInfoCommand;
use crate::subcmd::slice::SliceCommand;
use crate::subcmd::unpack::UnpackCommand;

mod adapter;
mod config;
mod container;
mod error;
mod init;
mod select;
mod subcmd;
#[cfg(test)]
mod test_fixture;
mod util;

fn main() {
    let cmd_args = CmdArgs::parse();
    let (title, result) = run(&cmd_args);
    if let Err(err) = result {
        print_failed(title, &err);
        std::process::exit(1);
    }
}

fn run(cmd_args: &CmdArgs) -> (&'static str, Result<()>) {
    if let Err(err) = init::init() {
        return ("Init", Err(err));
    }
    match cmd_args {
        CmdArgs::Merge(merge_args) => ("Merge", MergeCommand::merge(merge_args)),
        CmdArgs::Slice(slice_args) => ("Slice", SliceCommand::slice(slice_args)),
        CmdArgs::Show(show_args) => ("Show", ShowInfoCommand::show(show_args)),
        CmdArgs::Unpack(unpack_args) => ("Unpack", UnpackCommand::unpack(unpack_args)),
    }
}

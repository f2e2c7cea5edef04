use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("shmframe {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: shmframe");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "slot: {} bytes, payload capacity {}",
        shmframe::codec::SLOT_SIZE,
        shmframe::codec::PAYLOAD_CAPACITY
    );
    println!("features: cli=true");

    Ok(SUCCESS)
}

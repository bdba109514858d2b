use clap::{arg,crate_version,Command};
use std::io::{Read,Write};
use unlzh::{lha,lh5,Error,STDRESULT};

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}",e);
        std::process::exit(1);
    }
}

fn run() -> STDRESULT
{
    let long_help =
"Extracts the member of a `-lh5-` compressed LHA archive into the working
directory, named as recorded in the archive.  A CRC mismatch is reported
but the extracted file is kept.";

    let matches = Command::new("unlzh")
        .about("Extract an -lh5- compressed LHA archive")
        .after_long_help(long_help)
        .version(crate_version!())
        .arg(arg!([archive] "path to the archive"))
        .get_matches();

    // handled by hand so the message stays stable
    let path = match matches.get_one::<String>("archive") {
        Some(path) => path,
        None => return Err(Box::new(Error::ArchiveNotSpecified))
    };

    let archive = std::fs::File::open(path).map_err(|e| Error::Open {
        path: path.clone(),
        source: e
    })?;
    let mut rd = std::io::BufReader::new(archive);
    let header = lha::read_level1(&mut rd)?;

    let out_file = std::fs::File::create(&header.filename).map_err(|e| Error::Open {
        path: header.filename.clone(),
        source: e
    })?;
    let mut payload = Vec::new();
    rd.take(header.packed_size as u64).read_to_end(&mut payload)?;

    let mut out = std::io::BufWriter::new(out_file);
    let crc = lh5::expand(&payload,header.original_size,&mut out)?;
    out.flush()?;

    // diagnostic only, the file is kept and the exit code stays 0
    if crc != header.crc {
        eprintln!("Error: {}",Error::CrcMismatch(header.filename));
    }

    Ok(())
}

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use env_logger::{Builder, Env};
use stratus_om::{DeallocList, ObjectId, OmError, OmResult, StorageConfig, StorageEngine};

const HELP: &str = "\
commands:
  insert <text>           create an object at the end of the file
  insert-near <oid> <text>
  read <oid>              print an object
  destroy <oid>           destroy an object
  prev [oid] / next [oid] step through the file
  scan / rscan            list every object forwards / backwards
  free                    perform queued page deallocations
  exit";

/// Parse an object identity written as `page:slot:unique`
fn parse_oid(text: &str, vol_no: u16) -> Option<ObjectId> {
    let mut parts = text.split(':');
    let page_no = parts.next()?.parse().ok()?;
    let slot_no = parts.next()?.parse().ok()?;
    let unique = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(ObjectId { vol_no, page_no, slot_no, unique })
}

fn print_oid(oid: &ObjectId) -> String {
    format!("{}:{}:{}", oid.page_no, oid.slot_no, oid.unique)
}

struct Shell {
    engine: StorageEngine,
    cat: ObjectId,
    pending: DeallocList,
}

impl Shell {
    fn oid_arg(&self, arg: Option<&str>) -> OmResult<ObjectId> {
        arg.and_then(|a| parse_oid(a, self.engine.config().vol_no))
            .ok_or(OmError::BadObjectId)
    }

    fn execute(&mut self, line: &str) -> OmResult<()> {
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));
        let rest = rest.trim();
        let om = self.engine.object_manager();

        match cmd {
            "insert" => {
                let oid = om.create_object(&self.cat, None, 0, rest.as_bytes())?;
                println!("{}", print_oid(&oid));
            }
            "insert-near" => {
                let (near, text) = rest.split_once(' ').unwrap_or((rest, ""));
                let near = self.oid_arg(Some(near))?;
                let oid = om.create_object(&self.cat, Some(&near), 0, text.as_bytes())?;
                println!("{}", print_oid(&oid));
            }
            "read" => {
                let oid = self.oid_arg(rest.split_whitespace().next())?;
                let data = om.read_object(&oid, 0, None)?;
                println!("{}", String::from_utf8_lossy(&data));
            }
            "destroy" => {
                let oid = self.oid_arg(rest.split_whitespace().next())?;
                om.destroy_object(&self.cat, &oid, &mut self.pending)?;
                println!("destroyed ({} deallocations pending)", self.pending.len());
            }
            "prev" | "next" => {
                let cur = match rest.split_whitespace().next() {
                    Some(arg) => Some(self.oid_arg(Some(arg))?),
                    None => None,
                };
                let found = if cmd == "prev" {
                    om.prev_object(&self.cat, cur.as_ref())?
                } else {
                    om.next_object(&self.cat, cur.as_ref())?
                };
                match found {
                    Some((oid, header)) => println!("{} ({} bytes)", print_oid(&oid), header.length),
                    None => println!("(no more objects)"),
                }
            }
            "scan" | "rscan" => {
                let mut cur = None;
                let mut count = 0;
                loop {
                    let found = if cmd == "scan" {
                        om.next_object(&self.cat, cur.as_ref())?
                    } else {
                        om.prev_object(&self.cat, cur.as_ref())?
                    };
                    let Some((oid, _)) = found else { break };
                    let data = om.read_object(&oid, 0, None)?;
                    println!("{:<16} {}", print_oid(&oid), String::from_utf8_lossy(&data));
                    cur = Some(oid);
                    count += 1;
                }
                println!("({} objects)", count);
            }
            "free" => {
                let freed = self.engine.free_dealloc_list(&mut self.pending)?;
                println!("freed {} pages", freed);
            }
            "help" => println!("{HELP}"),
            _ => println!("unknown command, try 'help'"),
        }
        Ok(())
    }
}

fn main() -> OmResult<()> {
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(arg) if arg.ends_with(".json") => StorageConfig::from_file(&PathBuf::from(arg))?,
        Some(dir) => StorageConfig::new(dir),
        None => StorageConfig::new("db"),
    };
    let file_name = args.next().unwrap_or_else(|| "default".to_string());

    let mut engine = StorageEngine::new(config)?;
    let cat = match engine.open_file(&file_name) {
        Ok(cat) => cat,
        Err(OmError::FileNotFound(_)) => engine.create_file(&file_name)?,
        Err(e) => return Err(e),
    };
    let pending = engine.new_dealloc_list();
    let mut shell = Shell { engine, cat, pending };

    println!("stratus object shell on file '{file_name}'");
    println!("type 'help' for commands\n");

    let stdin = io::stdin();
    loop {
        print!("om > ");
        io::stdout().flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let line = input.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" {
            break;
        }
        if let Err(err) = shell.execute(line) {
            println!("ERROR: {err}");
        }
    }

    shell.engine.free_dealloc_list(&mut shell.pending)?;
    shell.engine.shutdown()
}

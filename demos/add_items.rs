use casket_helper::{SessionEvent, StorageHelper};
use std::env::args;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt::init();

    let mut args = args().skip(1);
    let account = args.next().expect("no account");
    let password = args.next().expect("no password");
    let unit = args.next().expect("no storage unit name");
    let item = args.next().expect("no item name");
    let max = args.next().and_then(|raw| raw.parse().ok());

    let helper = StorageHelper::new();
    let mut events = helper.events();
    helper.login(&account, &password);
    while events.recv().await? != SessionEvent::Ready {}

    let moved = helper.add_items(&unit, &item, max).await?;
    println!("requested {moved} items to be moved into {unit}");

    Ok(())
}

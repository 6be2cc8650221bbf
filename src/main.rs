use log::{error, info};
use packet_monitor::core::{Configuration, Monitor, MonitorError, MonitorEvent};
use packet_monitor::setup_logger::setup_logger;
use packet_monitor::view::NotificationLevel;
use tokio::time::{interval, Duration};

enum Step {
    Shutdown,
    Report,
    Event(Option<MonitorEvent>),
}

#[tokio::main]
async fn main() -> Result<(), MonitorError> {
    let config = Configuration::from_env()?;
    setup_logger(&config.logging)?;
    info!("設定を読み込みました: {}", config.transport.endpoint);

    let mut monitor = Monitor::from_config(&config);

    // 接続中のCtrl-Cはリトライを打ち切る
    let abort = monitor.abort_handle();
    let abort_task = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            abort.abort();
        }
    });

    let connected = monitor.connect().await;
    abort_task.abort();
    print_notifications(&mut monitor);
    if let Err(e) = connected {
        error!("パケットスニッファーに接続できませんでした: {}", e);
        return Err(e);
    }

    let mut ticker = interval(Duration::from_secs(2));
    loop {
        let streaming = monitor.is_streaming();
        let step = tokio::select! {
            _ = tokio::signal::ctrl_c() => Step::Shutdown,
            _ = ticker.tick() => Step::Report,
            event = monitor.next_event(), if streaming => Step::Event(event),
        };

        match step {
            Step::Shutdown => {
                info!("終了します");
                break;
            }
            Step::Report => {
                report(&monitor);
                print_notifications(&mut monitor);
            }
            Step::Event(Some(MonitorEvent::Disconnected)) | Step::Event(None) => {
                print_notifications(&mut monitor);
                break;
            }
            Step::Event(Some(_)) => {}
        }
    }

    if monitor.is_streaming() {
        monitor.disconnect().await?;
    }
    print_notifications(&mut monitor);
    Ok(())
}

fn report(monitor: &Monitor) {
    let stats = monitor.stats();
    info!(
        "合計 {} | HTTP {} DNS {} TCP {} UDP {} ICMP {} ICMPv6 {} ARP {} その他 {}",
        stats.total,
        stats.http,
        stats.dns,
        stats.tcp,
        stats.udp,
        stats.icmp,
        stats.icmpv6,
        stats.arp,
        stats.other
    );

    for row in monitor.rows().iter().take(10) {
        info!(
            "#{} [{}] {} {} {}",
            row.seq, row.badge, row.time, row.connection, row.details
        );
    }
}

fn print_notifications(monitor: &mut Monitor) {
    for note in monitor.take_notifications() {
        match note.level {
            NotificationLevel::Error => eprintln!("[ERROR] {}", note.message),
            NotificationLevel::Warning => println!("[WARNING] {}", note.message),
            NotificationLevel::Info => println!("[INFO] {}", note.message),
            NotificationLevel::Success => println!("[SUCCESS] {}", note.message),
        }
    }
}

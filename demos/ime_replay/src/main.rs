use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Context;
use imebridge_core::*;
use serde::Deserialize;

#[derive(Deserialize)]
struct Script {
    #[serde(default)]
    config: RouterConfig,
    windows: Vec<WindowSpec>,
    #[serde(default)]
    focus: Option<WindowHandle>,
    /// Windows torn down after the replay.
    #[serde(default)]
    close_after: Vec<WindowHandle>,
    messages: Vec<ImeMessage>,
}

#[derive(Deserialize)]
struct WindowSpec {
    handle: WindowHandle,
    #[serde(default)]
    text: String,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| concat!(env!("CARGO_MANIFEST_DIR"), "/script.json").to_string());
    let raw = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
    let script: Script = serde_json::from_str(&raw).with_context(|| format!("parsing {path}"))?;

    let host = Rc::new(LoopbackHost::new());
    let router = InputContextRouter::on_current_thread(host.clone(), script.config);
    host.establish(HostId(1));

    let mut fields = Vec::new();
    for w in &script.windows {
        let field = Rc::new(RefCell::new(TextInputState::with_text(w.handle, w.text.clone())));
        let cx: ContextRef = field.clone();
        router.register(&cx)?;
        fields.push((cx, field));
    }
    if let Some(h) = script.focus {
        router.set_focus(h);
    }

    // the transport lives on its own thread, like a real IPC reader would
    let queue = InboundQueue::new();
    let reader = {
        let queue = queue.clone();
        let messages = script.messages;
        std::thread::spawn(move || -> Result<(), RouterError> {
            for m in messages {
                queue.push(m)?;
            }
            queue.close();
            Ok(())
        })
    };
    reader
        .join()
        .map_err(|_| anyhow::anyhow!("reader thread panicked"))??;

    let received = queue.pump(&router);
    let ran = router.flush();
    log::info!("pumped {received} messages, ran {ran} tasks");

    for (_, field) in &fields {
        let st = field.borrow();
        println!("{}: {:?}", st.handle(), st.text());
    }

    for h in &script.close_after {
        if let Some((cx, _)) = fields.iter().find(|(_, f)| f.borrow().handle() == *h) {
            router.unregister(cx);
        }
    }

    let stats = router.stats();
    println!("delivered {}, dropped {}", stats.delivered, stats.dropped);
    for sent in host.take_sent() {
        println!("-> host: {}", serde_json::to_string(&sent)?);
    }

    host.destroy(HostId(1));
    Ok(())
}

//! 病灶标注工具的无界面外壳.
//!
//! 把指针/菜单事件换成一行一条的文本命令, 每条命令恰好映射到核心库
//! 会话的一次调用; 图像坐标以 `<高> <宽>` 给出, 与窗口端换算无关.

use std::io::{self, BufRead, Write};
use std::path::Path;

mod commands;

use commands::Shell;

const USAGE: &str = "\
Commands:
    open <scan.raw>        load a volume (layers resolved by directory convention)
    method <LSC|TPS>       switch segmentation method (reopens the volume)
    tier <lower|higher>    switch superpixel tier (reopens the volume)
    slice <n> | next | prev
    mode                   toggle region-select / freehand-correct
    pen <n> | pen + | pen -
    press <l|r> <h> <w>    pointer down
    move <h> <w>           pointer drag
    release <h> <w>        pointer up
    reset | undo           reset current slice annotations / undo last reset
    grid | ann             toggle display overlays
    export <out.png>       save current scan slice as grayscale image
    marks <out.png>        save current manual-correction slice as-is
    status | save | close | close! | help | quit";

fn main() {
    println!("Annotation manager shell. Type `help` for commands.");

    let mut shell = Shell::new();
    let stdin = io::stdin();

    loop {
        print!("> ");
        io::stdout().flush().expect("stdout error");

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).expect("stdin error") == 0 {
            break; // EOF.
        }

        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {}
            ["help"] => println!("{USAGE}"),
            ["quit"] | ["exit"] => {
                if shell.guard_dirty("quit") {
                    break;
                }
            }
            ["quit!"] | ["exit!"] => break,
            ["open", path] => shell.open(Path::new(path)),
            ["method", name] => shell.set_method(name),
            ["tier", name] => shell.set_tier(name),
            ["slice", n] => shell.set_slice(n),
            ["next"] => shell.session_mut().next_slice(),
            ["prev"] => shell.session_mut().previous_slice(),
            ["mode"] => shell.toggle_mode(),
            ["pen", "+"] => shell.session_mut().widen_pen(),
            ["pen", "-"] => shell.session_mut().narrow_pen(),
            ["pen", n] => shell.set_pen(n),
            ["press", button, h, w] => shell.press(button, h, w),
            ["move", h, w] => shell.drag(h, w),
            ["release", h, w] => shell.release(h, w),
            ["reset"] => shell.reset(),
            ["undo"] => shell.undo(),
            ["grid"] => shell.session_mut().toggle_grid_display(),
            ["ann"] => shell.session_mut().toggle_annotations_display(),
            ["export", path] => shell.export(Path::new(path)),
            ["marks", path] => shell.export_marks(Path::new(path)),
            ["status"] => shell.status(),
            ["save"] => shell.save(),
            ["close"] => shell.close(false),
            ["close!"] => shell.close(true),
            _ => println!("Unknown command, type `help` for the list."),
        }
    }
}

/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into `front` buffer (array of Cell)
///   2. Compare each cell with `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// The world is sampled through the camera: each terminal cell covers a
/// `COL_PX` x `ROW_PX` pixel patch and shows whatever sits at its center.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::entity::{Actor, EnemyKind, Life};
use crate::domain::object::ObstacleKind;
use crate::domain::tile::{pixel_to_tile, Tile};
use crate::sim::world::World;

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Sentinel used to invalidate the back buffer so every cell is redrawn.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    fn fill_row(&mut self, y: usize, bg: Color) {
        for x in 0..self.width {
            self.set(x, y, Cell::new(' ', Color::White, bg));
        }
    }
}

// ── Renderer ──

/// World pixels covered by one terminal column / row.
const COL_PX: f64 = 16.0;
const ROW_PX: f64 = 32.0;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 20, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 200, g: 180, b: 50 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        self.sync_size();
        Ok(())
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        execute!(
            self.writer,
            ResetColor,
            cursor::Show,
            terminal::LeaveAlternateScreen
        )?;
        terminal::disable_raw_mode()
    }

    /// Resize buffers to the terminal and force a full repaint.
    fn sync_size(&mut self) -> bool {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        if tw as usize == self.term_w && th as usize == self.term_h {
            return false;
        }
        self.term_w = tw as usize;
        self.term_h = th as usize;
        self.front.resize(self.term_w, self.term_h);
        self.back.resize(self.term_w, self.term_h);
        self.back.cells.fill(Cell::INVALID);
        true
    }

    pub fn render(&mut self, world: &World) -> io::Result<()> {
        if self.sync_size() {
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.front.clear();
        self.compose(world);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }

    // ── Compose: build front buffer content ──

    fn compose(&mut self, w: &World) {
        let buf_w = self.front.width;
        let view_cols = ((w.camera.view_w / COL_PX) as usize).min(buf_w);
        let view_rows = (w.camera.view_h / ROW_PX).ceil() as usize;

        // ── HUD row ──
        let hud = format!(
            " {}   HP {}/{}   {}",
            w.level.title(),
            w.player.health.current(),
            w.player.health.max(),
            inventory_line(w),
        );
        self.front.fill_row(HUD_ROW, HUD_BG);
        self.front.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);

        // ── Map (camera viewport) ──
        for vy in 0..view_rows {
            let row = MAP_ROW + vy;
            if row >= self.front.height { break; }
            let wy = w.camera.y + vy as f64 * ROW_PX + ROW_PX / 2.0;
            for vx in 0..view_cols {
                let wx = w.camera.x + vx as f64 * COL_PX + COL_PX / 2.0;
                self.front.set(vx, row, sample(w, wx, wy));
            }
        }

        // ── Message bar ──
        let msg_row = MAP_ROW + view_rows + 1;
        if msg_row < self.front.height && !w.message.is_empty() {
            self.front.fill_row(msg_row, MSG_BG);
            self.front.put_str(0, msg_row, &format!(" {} ", w.message), Color::Black, MSG_BG);
        }

        // ── Help bar ──
        let help_row = MAP_ROW + view_rows + 2;
        if help_row < self.front.height {
            let help = " WASD/Arrows:Move  C:Slot  V/Space:Use  F5:Save  F9:Load  Esc:Quit";
            self.front.put_str(0, help_row, help, Color::DarkGrey, Cell::BASE_BG);
        }
    }
}

fn inventory_line(w: &World) -> String {
    let mut line = String::new();
    for (i, slot) in w.inventory.slots().iter().enumerate() {
        let label = match slot {
            Some(s) if s.count > 1 => format!("{} x{}", s.item.name(), s.count),
            Some(s) => s.item.name().to_string(),
            None => "-".to_string(),
        };
        if i == w.inventory.selected() {
            line.push_str(&format!("[{label}] "));
        } else {
            line.push_str(&format!(" {label}  "));
        }
    }
    line
}

/// What is visible at world point (wx, wy)? Actors over obstacles over tiles.
fn sample(w: &World, wx: f64, wy: f64) -> Cell {
    if wx < 0.0 || wy < 0.0 || wx >= w.grid.pixel_width() || wy >= w.grid.pixel_height() {
        return Cell::BLANK;
    }

    let tile = w.grid.tile_at(pixel_to_tile(wx), pixel_to_tile(wy));
    let bg = tile_bg(tile);

    if contains(&w.player, wx, wy) {
        let fg = if w.player.is_alive() { Color::Cyan } else { Color::DarkRed };
        return Cell::new('@', fg, bg);
    }

    if let Some(e) = w.enemies.iter().find(|e| contains(e, wx, wy)) {
        let ch = match (e.kind(), e.life) {
            (_, Life::Dying { .. }) | (_, Life::Removed) => 'x',
            (Some(EnemyKind::Duck), _) => 'D',
            (Some(EnemyKind::Sheep), _) => 'S',
            (None, _) => '?',
        };
        let fg = if e.combat.is_attacking(w.tick) { Color::Red } else { Color::Yellow };
        return Cell::new(ch, fg, bg);
    }

    if let Some(o) = w.obstacles.iter().find(|o| {
        let b = o.bounds();
        wx >= b.x && wx < b.right() && wy >= b.y && wy < b.bottom()
    }) {
        return match &o.kind {
            ObstacleKind::Chest { opened: false, .. } => Cell::new('$', Color::Rgb { r: 200, g: 140, b: 60 }, bg),
            ObstacleKind::Chest { opened: true, .. } => Cell::new('_', Color::Rgb { r: 140, g: 100, b: 50 }, bg),
            ObstacleKind::Door { opened: false, .. } => Cell::new('+', Color::Rgb { r: 170, g: 110, b: 40 }, bg),
            ObstacleKind::Door { opened: true, .. } => Cell::new('/', Color::Rgb { r: 170, g: 110, b: 40 }, bg),
            ObstacleKind::Tree => Cell::new('T', Color::Green, bg),
        };
    }

    match tile {
        Tile::Wall => Cell::new('#', Color::Grey, bg),
        Tile::Stone => Cell::new('.', Color::DarkGrey, bg),
        Tile::Grass => Cell::new(' ', Color::White, bg),
    }
}

fn tile_bg(tile: Tile) -> Color {
    match tile {
        Tile::Grass => Color::Rgb { r: 30, g: 70, b: 35 },
        Tile::Wall => Color::Rgb { r: 80, g: 80, b: 90 },
        Tile::Stone => Color::Rgb { r: 75, g: 75, b: 60 },
    }
}

fn contains(actor: &Actor, wx: f64, wy: f64) -> bool {
    let b = actor.sprite_box_at(actor.x, actor.y);
    wx >= b.x && wx < b.right() && wy >= b.y && wy < b.bottom()
}

//! X11 Session
//!
//! Owns the display connection and every server-side resource the mascot
//! uses: one override-free, undecorated window hinted as a sticky dock, a
//! body pixmap and a 1-bit mask pixmap per frame, a graphics context and a
//! caption font.
//!
//! The window is shaped with the SHAPE extension so only the sprite's opaque
//! pixels are visible. Without SHAPE the window stays rectangular.

use std::os::unix::io::{AsRawFd, RawFd};

use async_trait::async_trait;
use tokio::io::unix::AsyncFd;
use tracing::{debug, info, warn};
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::ConnectionError;
use x11rb::protocol::shape::{self, ConnectionExt as _, SK, SO};
use x11rb::protocol::xproto::{
    Atom, AtomEnum, Char2b, ClientMessageEvent, ConfigureWindowAux, ConnectionExt as _,
    CreateGCAux, CreateWindowAux, EventMask, Font, Gcontext, ImageFormat, Pixmap, PropMode,
    Property, VisualClass, Window, WindowClass,
};
use x11rb::protocol::Event;
use x11rb::rust_connection::RustConnection;
use x11rb::wrapper::ConnectionExt as _;

use mascot_core::{MascotConfig, Position, Sprite, Surface, SurfaceError, SurfaceEvent};

use crate::error::X11Error;
use crate::upload::{bands, pack_body, pack_mask, BitmapLayout, PixelLayout};

/// Window title
const WINDOW_NAME: &str = "Mascot";

/// `WM_CLASS` instance and class, NUL separated
const WINDOW_CLASS: &[u8] = b"desk-mascot\0DeskMascot\0";

/// Longest notification accepted, in 32-bit units
const MAX_PROPERTY_WORDS: u32 = 100_000;

/// `_NET_MOVERESIZE_WINDOW`: static gravity, x/y/width/height present
const MOVERESIZE_FLAGS: u32 = 10 | (1 << 8) | (1 << 9) | (1 << 10) | (1 << 11);

/// `_NET_WM_STATE_ADD`
const NET_WM_STATE_ADD: u32 = 1;

/// Source indication for EWMH client messages: normal application
const SOURCE_APPLICATION: u32 = 1;

/// Caption placement on the sign
const CAPTION_LEFT: i16 = 20;
const CAPTION_BASELINE: i16 = 150;
const CAPTION_LINE_HEIGHT: i16 = 14;

/// `ImageText16` takes at most 255 characters
const MAX_TEXT_CHARS: usize = 255;

x11rb::atom_manager! {
    Atoms: AtomsCookie {
        _NET_WM_STATE,
        _NET_WM_STATE_STAYS_ON_TOP,
        _NET_WM_STATE_ABOVE,
        _NET_WM_STATE_SKIP_TASKBAR,
        _NET_WM_STATE_SKIP_PAGER,
        _NET_WM_STATE_STICKY,
        _NET_WM_WINDOW_TYPE,
        _NET_WM_WINDOW_TYPE_DOCK,
        _NET_MOVERESIZE_WINDOW,
        _NET_SUPPORTED,
        _NET_WM_NAME,
        UTF8_STRING,
    }
}

/// How the window is moved on each present
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MoveRequest {
    /// `_NET_MOVERESIZE_WINDOW` to the window manager
    Ewmh,
    /// Plain `ConfigureWindow`, when no window manager advertises the message
    Configure,
}

impl MoveRequest {
    fn for_supported(supported: &[Atom], moveresize: Atom) -> Self {
        if supported.contains(&moveresize) {
            MoveRequest::Ewmh
        } else {
            MoveRequest::Configure
        }
    }
}

/// One uploaded frame: body and mask pixmaps
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct X11Frame {
    body: Pixmap,
    mask: Pixmap,
    width: u16,
    height: u16,
}

/// The mascot's window on an X server
pub struct X11Session {
    // Deregisters the fd from the reactor, so it must drop before `conn`
    fd: AsyncFd<RawFd>,
    conn: RustConnection,
    root: Window,
    window: Window,
    depth: u8,
    gc: Gcontext,
    mask_gc: Option<Gcontext>,
    font: Font,
    atoms: Atoms,
    notify: Atom,
    shape: bool,
    move_request: MoveRequest,
    pixel_layout: PixelLayout,
    bitmap_layout: BitmapLayout,
    screen_size: (u32, u32),
    window_size: (u16, u16),
    pixmaps: Vec<Pixmap>,
}

impl X11Session {
    /// Connect to `$DISPLAY` and set up a window sized to the sprites
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Any connection, visual, font, or request failure.
    pub fn connect(config: &MascotConfig, sprite_size: (u32, u32)) -> Result<Self, X11Error> {
        let too_large = || X11Error::SpriteTooLarge {
            width: sprite_size.0,
            height: sprite_size.1,
        };
        let window_size = (
            u16::try_from(sprite_size.0).map_err(|_| too_large())?,
            u16::try_from(sprite_size.1).map_err(|_| too_large())?,
        );

        let (conn, screen_num) = x11rb::connect(None)?;
        let setup = conn.setup();
        let screen = setup
            .roots
            .get(screen_num)
            .ok_or(X11Error::NoScreen(screen_num))?;

        let depth = screen.root_depth;
        let bits_per_pixel = setup
            .pixmap_formats
            .iter()
            .find(|f| f.depth == depth)
            .map_or(0, |f| f.bits_per_pixel);
        let visual = screen
            .allowed_depths
            .iter()
            .filter(|d| d.depth == depth)
            .flat_map(|d| d.visuals.iter())
            .find(|v| v.visual_id == screen.root_visual)
            .filter(|v| v.class == VisualClass::TRUE_COLOR && bits_per_pixel == 32)
            .ok_or(X11Error::UnsupportedVisual {
                depth,
                bits_per_pixel,
            })?;

        let pixel_layout = PixelLayout::new(visual, setup.image_byte_order);
        let bitmap_layout = BitmapLayout {
            bit_order: setup.bitmap_format_bit_order.into(),
            byte_order: setup.image_byte_order.into(),
            scanline_unit: setup.bitmap_format_scanline_unit,
            scanline_pad: setup.bitmap_format_scanline_pad,
        };
        let root = screen.root;
        let root_visual = screen.root_visual;
        let (black, white) = (screen.black_pixel, screen.white_pixel);
        let screen_size = (
            u32::from(screen.width_in_pixels),
            u32::from(screen.height_in_pixels),
        );

        info!(
            screen = screen_num,
            width = screen_size.0,
            height = screen_size.1,
            depth,
            "Connected to X server"
        );

        let atoms = Atoms::new(&conn)?.reply()?;
        let notify = conn
            .intern_atom(false, config.notify_property.as_bytes())?
            .reply()?
            .atom;
        let shape = conn
            .extension_information(shape::X11_EXTENSION_NAME)?
            .is_some();
        if !shape {
            warn!("SHAPE extension missing, window will be rectangular");
        }
        let supported = conn
            .get_property(
                false,
                root,
                atoms._NET_SUPPORTED,
                AtomEnum::ATOM,
                0,
                MAX_PROPERTY_WORDS,
            )?
            .reply()?;
        let supported: Vec<Atom> = supported.value32().into_iter().flatten().collect();
        let move_request = MoveRequest::for_supported(&supported, atoms._NET_MOVERESIZE_WINDOW);
        debug!(?move_request, "Window move method");

        let window = conn.generate_id()?;
        let start_x = -i16::try_from(window_size.0).map_err(|_| too_large())?;
        let ground = i16::try_from(screen_size.1.saturating_sub(sprite_size.1)).unwrap_or(i16::MAX);
        conn.create_window(
            depth,
            window,
            root,
            start_x,
            ground,
            window_size.0,
            window_size.1,
            0,
            WindowClass::INPUT_OUTPUT,
            root_visual,
            &CreateWindowAux::new()
                .background_pixmap(x11rb::NONE)
                .event_mask(EventMask::EXPOSURE | EventMask::PROPERTY_CHANGE),
        )?;

        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_NAME,
            AtomEnum::STRING,
            WINDOW_NAME.as_bytes(),
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            atoms._NET_WM_NAME,
            atoms.UTF8_STRING,
            WINDOW_NAME.as_bytes(),
        )?;
        conn.change_property8(
            PropMode::REPLACE,
            window,
            AtomEnum::WM_CLASS,
            AtomEnum::STRING,
            WINDOW_CLASS,
        )?;
        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms._NET_WM_WINDOW_TYPE,
            AtomEnum::ATOM,
            &[atoms._NET_WM_WINDOW_TYPE_DOCK],
        )?;
        let states = wm_states(&atoms);
        conn.change_property32(
            PropMode::REPLACE,
            window,
            atoms._NET_WM_STATE,
            AtomEnum::ATOM,
            &states,
        )?;

        let font = open_font(&conn, &config.font)?;
        let gc = conn.generate_id()?;
        conn.create_gc(
            gc,
            window,
            &CreateGCAux::new()
                .foreground(black)
                .background(white)
                .font(font),
        )?;

        conn.map_window(window)?;

        // Window managers that already manage the window only honor requests
        for state in states {
            let message = ClientMessageEvent::new(
                32,
                window,
                atoms._NET_WM_STATE,
                [NET_WM_STATE_ADD, state, 0, SOURCE_APPLICATION, 0],
            );
            conn.send_event(
                false,
                root,
                EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
                message,
            )?;
        }
        conn.flush()?;

        let fd = AsyncFd::new(conn.stream().as_raw_fd())?;
        debug!(window, notify, "Mascot window mapped");

        Ok(Self {
            fd,
            conn,
            root,
            window,
            depth,
            gc,
            mask_gc: None,
            font,
            atoms,
            notify,
            shape,
            move_request,
            pixel_layout,
            bitmap_layout,
            screen_size,
            window_size,
            pixmaps: Vec::new(),
        })
    }

    fn upload_sprite(&mut self, sprite: &Sprite) -> Result<X11Frame, X11Error> {
        let too_large = || X11Error::SpriteTooLarge {
            width: sprite.width(),
            height: sprite.height(),
        };
        let width = u16::try_from(sprite.width()).map_err(|_| too_large())?;
        let height = u16::try_from(sprite.height()).map_err(|_| too_large())?;

        let body = self.conn.generate_id()?;
        self.conn
            .create_pixmap(self.depth, body, self.window, width, height)?;
        self.pixmaps.push(body);
        let data = pack_body(sprite.body(), &self.pixel_layout);
        self.put_image(
            ImageFormat::Z_PIXMAP,
            body,
            self.gc,
            self.depth,
            (width, height),
            &data,
        )?;

        let mask = self.conn.generate_id()?;
        self.conn.create_pixmap(1, mask, self.window, width, height)?;
        self.pixmaps.push(mask);
        let mask_gc = self.mask_gc(mask)?;
        let data = pack_mask(sprite.mask(), &self.bitmap_layout);
        self.put_image(ImageFormat::XY_PIXMAP, mask, mask_gc, 1, (width, height), &data)?;

        Ok(X11Frame {
            body,
            mask,
            width,
            height,
        })
    }

    /// A depth-1 GC, created against the first mask pixmap
    fn mask_gc(&mut self, bitmap: Pixmap) -> Result<Gcontext, X11Error> {
        if let Some(gc) = self.mask_gc {
            return Ok(gc);
        }
        let gc = self.conn.generate_id()?;
        self.conn.create_gc(gc, bitmap, &CreateGCAux::new())?;
        self.mask_gc = Some(gc);
        Ok(gc)
    }

    /// `PutImage` split into bands that fit the maximum request length
    fn put_image(
        &self,
        format: ImageFormat,
        drawable: Pixmap,
        gc: Gcontext,
        depth: u8,
        (width, height): (u16, u16),
        data: &[u8],
    ) -> Result<(), X11Error> {
        let stride = data.len() / usize::from(height.max(1));
        for (first, rows) in bands(height, stride, self.conn.maximum_request_bytes()) {
            let start = usize::from(first) * stride;
            let end = start + usize::from(rows) * stride;
            let y = i16::try_from(first).unwrap_or(i16::MAX);
            self.conn.put_image(
                format,
                drawable,
                gc,
                width,
                rows,
                0,
                y,
                0,
                depth,
                &data[start..end],
            )?;
        }
        Ok(())
    }

    /// Read and delete the notification property
    fn take_notification(&self) -> Result<Option<Vec<u8>>, X11Error> {
        let reply = self
            .conn
            .get_property(
                true,
                self.window,
                self.notify,
                AtomEnum::ANY,
                0,
                MAX_PROPERTY_WORDS,
            )?
            .reply()?;

        if reply.bytes_after > 0 {
            // Oversized values are not deleted by GetProperty
            self.conn.delete_property(self.window, self.notify)?;
            warn!(bytes_after = reply.bytes_after, "Notification too large, dropped");
            return Ok(None);
        }
        if reply.format != 8 || reply.value.is_empty() {
            debug!(format = reply.format, "Ignoring non-text notification");
            return Ok(None);
        }
        Ok(Some(reply.value))
    }

    fn present_frame(&self, frame: &X11Frame, position: Position) -> Result<(), X11Error> {
        if self.shape {
            self.conn
                .shape_mask(SO::SET, SK::BOUNDING, self.window, 0, 0, frame.mask)?;
        } else {
            self.conn.clear_area(true, self.window, 0, 0, 0, 0)?;
        }

        match self.move_request {
            MoveRequest::Ewmh => {
                let message = ClientMessageEvent::new(
                    32,
                    self.window,
                    self.atoms._NET_MOVERESIZE_WINDOW,
                    moveresize_data(position, self.window_size),
                );
                self.conn.send_event(
                    false,
                    self.root,
                    EventMask::SUBSTRUCTURE_REDIRECT | EventMask::SUBSTRUCTURE_NOTIFY,
                    message,
                )?;
            }
            MoveRequest::Configure => {
                self.conn.configure_window(
                    self.window,
                    &ConfigureWindowAux::new().x(position.x).y(position.y),
                )?;
            }
        }
        Ok(())
    }

    fn redraw_frame(&self, frame: &X11Frame, caption: &[String]) -> Result<(), X11Error> {
        self.conn.copy_area(
            frame.body,
            self.window,
            self.gc,
            0,
            0,
            0,
            0,
            frame.width,
            frame.height,
        )?;
        let mut baseline = CAPTION_BASELINE;
        for line in caption {
            self.conn
                .image_text16(self.window, self.gc, CAPTION_LEFT, baseline, &to_char2b(line))?;
            baseline = baseline.saturating_add(CAPTION_LINE_HEIGHT);
        }
        Ok(())
    }

    fn next_event(&self) -> Result<Option<SurfaceEvent>, X11Error> {
        let Some(event) = self.conn.poll_for_event()? else {
            return Ok(None);
        };

        let event = match event {
            Event::Expose(e) if e.window == self.window && e.count == 0 => SurfaceEvent::Expose,
            Event::PropertyNotify(e)
                if e.window == self.window
                    && e.atom == self.notify
                    && e.state == Property::NEW_VALUE =>
            {
                self.take_notification()?
                    .map_or(SurfaceEvent::Other, SurfaceEvent::Notification)
            }
            Event::Error(e) => {
                warn!(error = ?e, "X error");
                SurfaceEvent::Other
            }
            _ => SurfaceEvent::Other,
        };
        Ok(Some(event))
    }

    fn release(&mut self) -> Result<(), ConnectionError> {
        for pixmap in self.pixmaps.drain(..) {
            self.conn.free_pixmap(pixmap)?;
        }
        if let Some(gc) = self.mask_gc.take() {
            self.conn.free_gc(gc)?;
        }
        self.conn.free_gc(self.gc)?;
        self.conn.close_font(self.font)?;
        self.conn.destroy_window(self.window)?;
        self.conn.flush()
    }
}

#[async_trait(?Send)]
impl Surface for X11Session {
    type Frame = X11Frame;

    fn upload(&mut self, sprite: &Sprite) -> Result<X11Frame, SurfaceError> {
        Ok(self.upload_sprite(sprite)?)
    }

    fn present(&mut self, frame: &X11Frame, position: Position) -> Result<(), SurfaceError> {
        Ok(self.present_frame(frame, position)?)
    }

    fn redraw(&mut self, frame: &X11Frame, caption: &[String]) -> Result<(), SurfaceError> {
        Ok(self.redraw_frame(frame, caption)?)
    }

    fn poll_event(&mut self) -> Result<Option<SurfaceEvent>, SurfaceError> {
        Ok(self.next_event()?)
    }

    async fn readable(&mut self) -> Result<(), SurfaceError> {
        self.conn.flush().map_err(X11Error::from)?;
        let mut guard = self.fd.readable().await?;
        guard.clear_ready();
        Ok(())
    }

    fn screen_size(&self) -> (u32, u32) {
        self.screen_size
    }
}

impl Drop for X11Session {
    fn drop(&mut self) {
        match self.release() {
            Ok(()) => debug!("X resources released"),
            Err(e) => warn!(error = %e, "Failed to release X resources"),
        }
    }
}

/// Open the configured font, falling back to `fixed`
fn open_font(conn: &RustConnection, name: &str) -> Result<Font, X11Error> {
    let font = conn.generate_id()?;
    match conn.open_font(font, name.as_bytes())?.check() {
        Ok(()) => return Ok(font),
        Err(e) => warn!(font = name, error = %e, "Caption font unavailable, trying \"fixed\""),
    }
    conn.open_font(font, b"fixed")?
        .check()
        .map_err(|_| X11Error::Font(name.to_string()))?;
    Ok(font)
}

/// `_NET_MOVERESIZE_WINDOW` payload
///
/// Client message data carries signed coordinates as CARD32.
#[allow(clippy::cast_sign_loss)]
fn moveresize_data(position: Position, (width, height): (u16, u16)) -> [u32; 5] {
    [
        MOVERESIZE_FLAGS,
        position.x as u32,
        position.y as u32,
        u32::from(width),
        u32::from(height),
    ]
}

/// Window states requested from the window manager
fn wm_states(atoms: &Atoms) -> [Atom; 5] {
    [
        atoms._NET_WM_STATE_STAYS_ON_TOP,
        atoms._NET_WM_STATE_ABOVE,
        atoms._NET_WM_STATE_SKIP_TASKBAR,
        atoms._NET_WM_STATE_SKIP_PAGER,
        atoms._NET_WM_STATE_STICKY,
    ]
}

/// Encode text as 16-bit big-endian glyph indices
///
/// Characters outside the Basic Multilingual Plane become `?`.
fn to_char2b(line: &str) -> Vec<Char2b> {
    line.chars()
        .take(MAX_TEXT_CHARS)
        .map(|c| {
            let code = u16::try_from(u32::from(c)).unwrap_or(u16::from(b'?'));
            let [byte1, byte2] = code.to_be_bytes();
            Char2b { byte1, byte2 }
        })
        .collect()
}

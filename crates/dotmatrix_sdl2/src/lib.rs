use anyhow::{anyhow, Result};
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;
use typed_builder::TypedBuilder;

use dotmatrix_common::app::App;
use dotmatrix_common::key::Key;

pub use sdl2;

#[derive(TypedBuilder)]
pub struct SdlInitInfo {
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub title: String,
}

pub struct SdlContext;

impl SdlContext {
    /// Open a window and drive `app` until it asks to exit or the window
    /// closes. Each iteration pumps events, runs one `App::update`, and
    /// streams the RGB24 screen buffer to a scaled texture.
    pub fn run(init_info: SdlInitInfo, mut app: impl App) -> Result<()> {
        let SdlInitInfo {
            width,
            height,
            scale,
            title,
        } = init_info;

        log::info!("opening {}x{} window (scale {})", width, height, scale);
        let sdl_context = sdl2::init().map_err(|e| anyhow!("sdl init: {e}"))?;
        let video_subsystem = sdl_context.video().map_err(|e| anyhow!("sdl video: {e}"))?;
        let window = video_subsystem
            .window(&title, width * scale, height * scale)
            .position_centered()
            .build()?;
        let mut canvas = window.into_canvas().present_vsync().build()?;
        canvas
            .set_scale(scale as f32, scale as f32)
            .map_err(|e| anyhow!("sdl scale: {e}"))?;
        let creator = canvas.texture_creator();
        let mut texture = creator.create_texture_target(PixelFormatEnum::RGB24, width, height)?;

        let mut event_pump = sdl_context
            .event_pump()
            .map_err(|e| anyhow!("sdl event pump: {e}"))?;
        let mut screen_state = vec![0u8; (width * height * 3) as usize];

        app.init();
        loop {
            if app.should_exit() {
                app.exit();
                return Ok(());
            }

            while let Some(event) = event_pump.poll_event() {
                match event {
                    Event::Quit { .. } => {
                        app.exit();
                        return Ok(());
                    }
                    Event::KeyDown {
                        keycode: Some(keycode),
                        ..
                    } => app.handle_key_event(map_keycode(keycode), true),
                    Event::KeyUp {
                        keycode: Some(keycode),
                        ..
                    } => app.handle_key_event(map_keycode(keycode), false),
                    _ => {}
                }
            }

            app.update(&mut screen_state);

            texture.update(None, &screen_state, (width * 3) as usize)?;
            canvas
                .copy(&texture, None, None)
                .map_err(|e| anyhow!("sdl copy: {e}"))?;
            canvas.present();
        }
    }
}

pub fn map_keycode(keycode: Keycode) -> Key {
    match keycode {
        Keycode::Up => Key::Up,
        Keycode::Down => Key::Down,
        Keycode::Left => Key::Left,
        Keycode::Right => Key::Right,
        Keycode::A => Key::A,
        Keycode::B => Key::B,
        Keycode::S => Key::S,
        Keycode::X => Key::X,
        Keycode::Z => Key::Z,
        Keycode::Return => Key::Return,
        Keycode::Backspace => Key::Backspace,
        Keycode::Escape => Key::Escape,
        _ => Key::None,
    }
}

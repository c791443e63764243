use crate::error::AppError;
use aquabotanica_core::clock::ClockTime;
use aquabotanica_core::hardware::{Screen, Tone};
use aquabotanica_core::irrigation::{Mood, WateringStatus};
use aquabotanica_core::mode::PlantMode;
use aquabotanica_core::Error;
use core::fmt::{self, Write};
use embedded_graphics::{
  mono_font::{
    ascii::{FONT_10X20, FONT_9X18_BOLD},
    MonoFont, MonoTextStyleBuilder,
  },
  pixelcolor::{
    raw::{RawData, RawU16},
    Rgb565,
  },
  prelude::*,
  primitives::{Arc, Circle, ContainsPoint, Ellipse, PointsIter, PrimitiveStyle, Rectangle},
  text::{Alignment, Baseline, Text, TextStyleBuilder},
};
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_svc::hal::ledc::LedcDriver;
use esp_idf_svc::hal::spi::{SpiDeviceDriver, SpiDriver};

/// Panel width in landscape orientation.
const WIDTH: u32 = 320;

/// Panel height in landscape orientation.
const HEIGHT: u32 = 240;

/// Bytes buffered before an SPI transfer.
const CHUNK: usize = 1024;

/// Software reset.
const CMD_SWRESET: u8 = 0x01;

/// Sleep out.
const CMD_SLPOUT: u8 = 0x11;

/// Display on.
const CMD_DISPON: u8 = 0x29;

/// Column address set.
const CMD_CASET: u8 = 0x2a;

/// Page address set.
const CMD_PASET: u8 = 0x2b;

/// Memory write.
const CMD_RAMWR: u8 = 0x2c;

/// Memory access control.
const CMD_MADCTL: u8 = 0x36;

/// Pixel format.
const CMD_COLMOD: u8 = 0x3a;

/// Row/column exchange with BGR order, i.e. landscape.
const MADCTL_LANDSCAPE: u8 = 0x28;

/// 16 bits per pixel.
const COLMOD_RGB565: u8 = 0x55;

/// Face color of the periodic standby graphic.
const DARK_ORANGE: u16 = 0xfcc0;

/// Face color shown on entering standby.
const DARK_YELLOW: u16 = 0xcd00;

/// Left edge of the live panel labels.
const LABEL_X: i32 = 10;

/// Left edge of the live panel values.
const VALUE_X: i32 = 200;

/// Characters a value is padded to, so a shorter value erases a longer one.
const VALUE_WIDTH: usize = 11;

/// Live panel rows.
const ROW_CLOCK: i32 = 60;
const ROW_MOISTURE: i32 = 100;
const ROW_TEMPERATURE: i32 = 140;
const ROW_HUMIDITY: i32 = 180;

/// ILI9341 TFT controller on a write-only SPI bus.
pub struct Ili9341<'a> {
  /// The SPI device.
  spi: SpiDeviceDriver<'a, SpiDriver<'a>>,

  /// Data/command select.
  dc: PinDriver<'a, AnyOutputPin, Output>,

  /// Pixel staging buffer.
  buffer: Vec<u8>,
}

/// The ILI9341 implementation.
impl<'a> Ili9341<'a> {
  /// Create a new ILI9341 display.
  ///
  /// # Parameters
  /// - `spi`: The SPI device.
  /// - `dc`: The data/command pin.
  ///
  /// # Returns
  /// The ILI9341 display.
  pub fn new(
    spi: SpiDeviceDriver<'a, SpiDriver<'a>>,
    dc: PinDriver<'a, AnyOutputPin, Output>
  ) -> Self {
    Self { spi, dc, buffer: Vec::with_capacity(CHUNK) }
  }

  /// Initialize the display in landscape RGB565 mode.
  ///
  /// # Returns
  /// The result of the operation.
  pub fn init(&mut self) -> Result<(), AppError> {
    self.command(CMD_SWRESET, &[])?;
    FreeRtos::delay_ms(150);

    self.command(CMD_SLPOUT, &[])?;
    FreeRtos::delay_ms(120);

    self.command(CMD_COLMOD, &[COLMOD_RGB565])?;
    self.command(CMD_MADCTL, &[MADCTL_LANDSCAPE])?;
    self.command(CMD_DISPON, &[])?;
    FreeRtos::delay_ms(20);

    Ok(())
  }

  /// Send a command followed by its parameters.
  ///
  /// # Parameters
  /// - `cmd`: The command.
  /// - `params`: The parameter bytes.
  ///
  /// # Returns
  /// The result of the operation.
  fn command(&mut self, cmd: u8, params: &[u8]) -> Result<(), AppError> {
    self.dc.set_low()
      .map_err(|e| AppError::DisplayError(format!("Failed to select command mode: {:?}", e)))?;
    self.spi.write(&[cmd])
      .map_err(|e| AppError::DisplayError(format!(
        "Failed to write command 0x{:02x} to display: {:?}",
        cmd, e
      )))?;

    if !params.is_empty() {
      self.dc.set_high()
        .map_err(|e| AppError::DisplayError(format!("Failed to select data mode: {:?}", e)))?;
      self.spi.write(params)
        .map_err(|e| AppError::DisplayError(format!(
          "Failed to write parameters of command 0x{:02x} to display: {:?}",
          cmd, e
        )))?;
    }

    Ok(())
  }

  /// Restrict memory writes to `area` and start a memory write.
  ///
  /// # Parameters
  /// - `area`: A non-empty rectangle inside the panel.
  ///
  /// # Returns
  /// The result of the operation.
  fn set_window(&mut self, area: &Rectangle) -> Result<(), AppError> {
    let Some(bottom_right) = area.bottom_right() else {
      return Ok(());
    };

    let [x0h, x0l] = (area.top_left.x as u16).to_be_bytes();
    let [x1h, x1l] = (bottom_right.x as u16).to_be_bytes();
    let [y0h, y0l] = (area.top_left.y as u16).to_be_bytes();
    let [y1h, y1l] = (bottom_right.y as u16).to_be_bytes();

    self.command(CMD_CASET, &[x0h, x0l, x1h, x1l])?;
    self.command(CMD_PASET, &[y0h, y0l, y1h, y1l])?;
    self.command(CMD_RAMWR, &[])?;

    self.dc.set_high()
      .map_err(|e| AppError::DisplayError(format!("Failed to select data mode: {:?}", e)))
  }

  /// Stream pixels into the current window.
  ///
  /// # Parameters
  /// - `colors`: The pixels, row by row.
  ///
  /// # Returns
  /// The result of the operation.
  fn write_colors<I>(&mut self, colors: I) -> Result<(), AppError>
  where
    I: IntoIterator<Item = Rgb565>,
  {
    let Self { spi, buffer, .. } = self;
    buffer.clear();

    for color in colors {
      buffer.extend_from_slice(&RawU16::from(color).into_inner().to_be_bytes());

      if buffer.len() >= CHUNK {
        spi.write(buffer.as_slice())
          .map_err(|e| AppError::DisplayError(format!("Failed to write pixel data: {:?}", e)))?;
        buffer.clear();
      }
    }

    if !buffer.is_empty() {
      spi.write(buffer.as_slice())
        .map_err(|e| AppError::DisplayError(format!("Failed to write pixel data: {:?}", e)))?;
    }

    Ok(())
  }
}

impl OriginDimensions for Ili9341<'_> {
  fn size(&self) -> Size {
    Size::new(WIDTH, HEIGHT)
  }
}

impl DrawTarget for Ili9341<'_> {
  type Color = Rgb565;
  type Error = AppError;

  fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
  where
    I: IntoIterator<Item = Pixel<Self::Color>>,
  {
    let bounds = self.bounding_box();

    for Pixel(point, color) in pixels {
      if bounds.contains(point) {
        self.set_window(&Rectangle::new(point, Size::new(1, 1)))?;
        self.write_colors(core::iter::once(color))?;
      }
    }

    Ok(())
  }

  fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
  where
    I: IntoIterator<Item = Self::Color>,
  {
    if area.is_zero_sized() {
      return Ok(());
    }

    let visible = area.intersection(&self.bounding_box());
    if visible == *area {
      self.set_window(area)?;
      return self.write_colors(colors);
    }

    // Partly off screen: fall back to clipped single pixels.
    self.draw_iter(
      area
        .points()
        .zip(colors)
        .filter(|(point, _)| visible.contains(*point))
        .map(|(point, color)| Pixel(point, color)),
    )
  }

  fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
    let area = area.intersection(&self.bounding_box());
    if area.is_zero_sized() {
      return Ok(());
    }

    self.set_window(&area)?;
    let count = area.size.width * area.size.height;
    self.write_colors((0..count).map(|_| color))
  }
}

/// The AquaBotanica screen: an ILI9341 panel plus its PWM backlight.
pub struct Tft<'a> {
  /// The panel.
  panel: Ili9341<'a>,

  /// The backlight channel.
  backlight: LedcDriver<'a>,
}

/// The screen implementation.
impl<'a> Tft<'a> {
  /// Create and initialize the screen, leaving it black at full brightness.
  ///
  /// # Parameters
  /// - `panel`: The panel driver.
  /// - `backlight`: The backlight PWM channel.
  ///
  /// # Returns
  /// The screen.
  pub fn new(mut panel: Ili9341<'a>, backlight: LedcDriver<'a>) -> Result<Self, AppError> {
    panel.init()?;
    panel.clear(Rgb565::BLACK)?;

    let mut tft = Self { panel, backlight };
    tft.brightness(100)?;

    Ok(tft)
  }

  /// Set the backlight duty cycle.
  ///
  /// # Parameters
  /// - `percent`: Brightness, clamped to 100.
  ///
  /// # Returns
  /// The result of the operation.
  fn brightness(&mut self, percent: u8) -> Result<(), AppError> {
    let duty = self.backlight.get_max_duty() * u32::from(percent.min(100)) / 100;
    self.backlight.set_duty(duty)
      .map_err(|e| AppError::DisplayError(format!("Failed to set backlight to {}%: {:?}", percent, e)))
  }

  /// Draw text centered on a point.
  fn centered(
    &mut self,
    text: &str,
    center: Point,
    font: &MonoFont<'_>,
    color: Rgb565
  ) -> Result<(), AppError> {
    let character_style = MonoTextStyleBuilder::new()
      .font(font)
      .text_color(color)
      .background_color(Rgb565::BLACK)
      .build();
    let text_style = TextStyleBuilder::new()
      .alignment(Alignment::Center)
      .baseline(Baseline::Middle)
      .build();

    Text::with_text_style(text, center, character_style, text_style).draw(&mut self.panel)?;

    Ok(())
  }

  /// Draw a live panel label.
  fn label(&mut self, text: &str, y: i32) -> Result<(), AppError> {
    let style = MonoTextStyleBuilder::new()
      .font(&FONT_9X18_BOLD)
      .text_color(Rgb565::WHITE)
      .background_color(Rgb565::BLACK)
      .build();

    Text::with_baseline(text, Point::new(LABEL_X, y), style, Baseline::Top).draw(&mut self.panel)?;

    Ok(())
  }

  /// Draw a live panel value, padded so it erases the previous one.
  fn value(&mut self, y: i32, args: fmt::Arguments<'_>) -> Result<(), AppError> {
    let mut text = heapless::String::<32>::new();
    text.write_fmt(args)
      .map_err(|_| AppError::DisplayError(format!("Value at row {} does not fit", y)))?;
    while text.len() < VALUE_WIDTH && text.push(' ').is_ok() {}

    let style = MonoTextStyleBuilder::new()
      .font(&FONT_9X18_BOLD)
      .text_color(Rgb565::WHITE)
      .background_color(Rgb565::BLACK)
      .build();

    Text::with_baseline(&text, Point::new(VALUE_X, y), style, Baseline::Top).draw(&mut self.panel)?;

    Ok(())
  }

  /// Clear the screen and draw the sunflower.
  ///
  /// # Parameters
  /// - `mood`: The mouth shape.
  /// - `face`: The face color.
  ///
  /// # Returns
  /// The result of the operation.
  fn sunflower(&mut self, mood: Mood, face: Rgb565) -> Result<(), AppError> {
    let center = Point::new(160, 90);
    let black = PrimitiveStyle::with_fill(Rgb565::BLACK);
    let green = PrimitiveStyle::with_fill(Rgb565::GREEN);

    self.panel.clear(Rgb565::BLACK)?;

    for step in 0..12 {
      let angle = (step as f32 * 30.0).to_radians();
      let petal = center + Point::new((angle.cos() * 60.0) as i32, (angle.sin() * 60.0) as i32);
      Circle::with_center(petal, 40)
        .into_styled(PrimitiveStyle::with_fill(Rgb565::YELLOW))
        .draw(&mut self.panel)?;
    }

    Circle::with_center(center, 100)
      .into_styled(PrimitiveStyle::with_fill(face))
      .draw(&mut self.panel)?;
    Circle::with_center(center + Point::new(-25, -12), 12).into_styled(black).draw(&mut self.panel)?;
    Circle::with_center(center + Point::new(25, -12), 12).into_styled(black).draw(&mut self.panel)?;

    let mouth = center + Point::new(0, 20);
    let stroke = PrimitiveStyle::with_stroke(Rgb565::BLACK, 4);
    match mood {
      Mood::Happy => {
        Arc::with_center(mouth, 50, 0.0.deg(), 180.0.deg()).into_styled(stroke).draw(&mut self.panel)?;
      }
      Mood::Sad => {
        Arc::with_center(mouth + Point::new(0, 10), 50, 180.0.deg(), 180.0.deg())
          .into_styled(stroke)
          .draw(&mut self.panel)?;
      }
      Mood::Neutral => {
        Rectangle::new(mouth + Point::new(-25, -2), Size::new(50, 4))
          .into_styled(black)
          .draw(&mut self.panel)?;
      }
    }

    // Stem and leaves.
    let stem_top = center.y + 50;
    Rectangle::new(Point::new(center.x - 6, stem_top), Size::new(12, 100))
      .into_styled(green)
      .draw(&mut self.panel)?;
    for dx in [-40, 40] {
      Ellipse::with_center(Point::new(center.x + dx, stem_top + 60), Size::new(60, 30))
        .into_styled(green)
        .draw(&mut self.panel)?;
    }

    Ok(())
  }
}

impl Screen for Tft<'_> {
  fn set_backlight(&mut self, percent: u8) -> Result<(), Error> {
    Ok(self.brightness(percent)?)
  }

  fn draw_live_panel(&mut self) -> Result<(), Error> {
    self.panel.clear(Rgb565::BLACK)?;
    self.centered("AquaBotanica", Point::new(160, 20), &FONT_10X20, Rgb565::WHITE)?;

    self.label("Uhrzeit:", ROW_CLOCK)?;
    self.label("Pflanze F.:", ROW_MOISTURE)?;
    self.label("Temperatur:", ROW_TEMPERATURE)?;
    self.label("Luft F.:", ROW_HUMIDITY)?;

    Ok(())
  }

  fn draw_clock(&mut self, time: ClockTime) -> Result<(), Error> {
    Ok(self.value(ROW_CLOCK, format_args!("{}", time.hms()))?)
  }

  fn draw_moisture(&mut self, moisture: i32) -> Result<(), Error> {
    Ok(self.value(ROW_MOISTURE, format_args!("{}", moisture))?)
  }

  fn draw_temperature(&mut self, celsius: f32) -> Result<(), Error> {
    Ok(self.value(ROW_TEMPERATURE, format_args!("{:.2} C", celsius))?)
  }

  fn draw_humidity(&mut self, percent: f32) -> Result<(), Error> {
    Ok(self.value(ROW_HUMIDITY, format_args!("{:.2} %", percent))?)
  }

  fn draw_status(&mut self, status: WateringStatus) -> Result<(), Error> {
    let color = match status {
      WateringStatus::Giessen => Rgb565::RED,
      WateringStatus::BaldGiessen => Rgb565::YELLOW,
      WateringStatus::AllesGut => Rgb565::GREEN,
    };

    self.panel.fill_solid(&Rectangle::new(Point::new(0, 200), Size::new(WIDTH, 40)), Rgb565::BLACK)?;
    self.centered(status.label(), Point::new(160, 220), &FONT_10X20, color)?;

    Ok(())
  }

  fn draw_standby(&mut self, mood: Option<Mood>) -> Result<(), Error> {
    let drawn = match mood {
      Some(mood) => self.sunflower(mood, Rgb565::from(RawU16::new(DARK_ORANGE))),
      None => self.sunflower(Mood::Neutral, Rgb565::from(RawU16::new(DARK_YELLOW))),
    };

    Ok(drawn?)
  }

  fn draw_mode_banner(&mut self, mode: PlantMode) -> Result<(), Error> {
    self.panel.clear(Rgb565::BLACK)?;
    self.centered("Modus:", Point::new(160, 110), &FONT_10X20, Rgb565::WHITE)?;
    self.centered(mode.label(), Point::new(160, 140), &FONT_10X20, Rgb565::WHITE)?;

    Ok(())
  }

  fn draw_notice(&mut self, text: &str, tone: Tone) -> Result<(), Error> {
    let color = match tone {
      Tone::Info => Rgb565::WHITE,
      Tone::Success => Rgb565::GREEN,
      Tone::Failure => Rgb565::RED,
    };

    self.panel.clear(Rgb565::BLACK)?;
    self.centered(text, Point::new(160, 100), &FONT_10X20, color)?;

    Ok(())
  }
}

use embuild::{build::CfgArgs, espidf};

fn main() -> Result<(), Box<dyn std::error::Error>> {
  // Exposes `esp_idf_version_*` cfgs used by the SD card driver setup.
  CfgArgs::output_propagated("ESP_IDF")?;
  espidf::sysenv::output();

  println!("cargo:rerun-if-changed=sdkconfig.defaults");
  println!("cargo:rerun-if-env-changed=AQUA_WIFI_SSID");
  println!("cargo:rerun-if-env-changed=AQUA_WIFI_PASS");
  println!("cargo:rerun-if-env-changed=AQUA_IOT_CONNECTION_STRING");

  Ok(())
}

use hidapi::HidApi;

use crate::probe::{DebugProbeInfo, ProbeSelector};
use crate::{ConfigurationError, Error};

/// Finds all CMSIS-DAP v1 (HID) probes.
#[tracing::instrument(skip_all)]
pub fn list_cmsisdap_devices() -> Result<Vec<DebugProbeInfo>, Error> {
    tracing::debug!("Searching for CMSIS-DAP probes using hidapi");
    let api = HidApi::new()?;

    let probes: Vec<_> = api
        .device_list()
        .filter_map(get_cmsisdap_hid_info)
        .collect();

    tracing::debug!("Found {} CMSIS-DAP probes", probes.len());
    Ok(probes)
}

/// Checks if a given HID device is a CMSIS-DAP v1 probe, returning Some(DebugProbeInfo) if so.
fn get_cmsisdap_hid_info(device: &hidapi::DeviceInfo) -> Option<DebugProbeInfo> {
    let prod_str = device.product_string().unwrap_or("");
    let path = device.path().to_str().unwrap_or("");
    if is_cmsis_dap(prod_str) || is_cmsis_dap(path) {
        tracing::trace!("CMSIS-DAP device with USB path: {:?}", device.path());
        tracing::trace!("                product_string: {:?}", prod_str);
        tracing::trace!(
            "                     interface: {}",
            device.interface_number()
        );

        Some(DebugProbeInfo {
            identifier: prod_str.to_owned(),
            vendor_id: device.vendor_id(),
            product_id: device.product_id(),
            serial_number: device.serial_number().map(|s| s.to_owned()),
            interface: device.interface_number(),
        })
    } else {
        None
    }
}

/// Opens the first HID device matching `selector`.
///
/// The serial number is only compared when the selector carries one.
pub(crate) fn open_device(selector: &ProbeSelector) -> Result<hidapi::HidDevice, Error> {
    tracing::debug!("Attempting to open {} in CMSIS-DAP v1 mode", selector);
    let api = HidApi::new()?;

    // Filter manually: HidApi::open() ignores the serial number when it is
    // not given, and cannot tell CMSIS-DAP interfaces apart.
    let device_info = api
        .device_list()
        .filter(|info| get_cmsisdap_hid_info(info).is_some())
        .find(|info| selector.matches_hid(info))
        .ok_or_else(|| ConfigurationError::ProbeNotFound(selector.to_string()))?;

    let device = device_info.open_device(&api)?;
    tracing::info!(
        "Opened {:04x}:{:04x} ({:?})",
        device_info.vendor_id(),
        device_info.product_id(),
        device_info.path()
    );
    Ok(device)
}

/// We recognise cmsis dap interfaces if they have string like "CMSIS-DAP"
/// in them. As devices spell CMSIS DAP differently we go through known
/// spellings/patterns looking for a match
fn is_cmsis_dap(id: &str) -> bool {
    id.contains("CMSIS-DAP") || id.contains("CMSIS_DAP")
}

//! Save a document to the user's downloads via a temporary object URL.

use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Blob, BlobPropertyBag, HtmlAnchorElement, Url};

use chatpad_types::{ChatError, Result};

pub const DEFAULT_FILENAME: &str = "document.html";

pub fn download_document(content: &str, filename: &str) -> Result<()> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| ChatError::JsInterop("No document object".to_string()))?;
    let body = document
        .body()
        .ok_or_else(|| ChatError::JsInterop("Document has no body".to_string()))?;

    let parts = js_sys::Array::of1(&JsValue::from_str(content));
    let options = BlobPropertyBag::new();
    options.set_type("text/html");
    let blob = Blob::new_with_str_sequence_and_options(&parts, &options).map_err(js_err)?;
    let url = Url::create_object_url_with_blob(&blob).map_err(js_err)?;

    let anchor: HtmlAnchorElement = document
        .create_element("a")
        .map_err(js_err)?
        .dyn_into()
        .map_err(|_| ChatError::JsInterop("Element is not an anchor".to_string()))?;
    anchor.set_href(&url);
    anchor.set_download(filename);

    body.append_child(&anchor).map_err(js_err)?;
    anchor.click();
    body.remove_child(&anchor).map_err(js_err)?;
    Url::revoke_object_url(&url).map_err(js_err)?;

    log::info!("Exported {} ({} bytes)", filename, content.len());
    Ok(())
}

fn js_err(e: JsValue) -> ChatError {
    ChatError::JsInterop(format!("{:?}", e))
}

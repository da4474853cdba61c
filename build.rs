// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

// 构建脚本: 静态链接FFmpeg时补齐Windows系统库
fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // ez-ffmpeg 的 static 特性在 MSVC 下不会自动带上这些依赖
    #[cfg(all(target_os = "windows", target_env = "msvc"))]
    {
        // x264 / mpeg4 编码器
        println!("cargo:rustc-link-lib=dylib=libx264");

        // VFW 与 OLE (avformat 的 Windows 设备/封装依赖)
        println!("cargo:rustc-link-lib=dylib=vfw32");
        println!("cargo:rustc-link-lib=dylib=oleaut32");

        // bcrypt: avutil 随机数
        println!("cargo:rustc-link-lib=dylib=bcrypt");
    }
}

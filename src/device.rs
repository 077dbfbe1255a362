export![capture, environment, light, material, model, postfx, renderer];
